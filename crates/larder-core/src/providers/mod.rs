// Recipe providers - one per recipe source
pub mod demo;

pub use demo::DemoRecipeProvider;
