pub mod extract;
pub mod health;
pub mod output;
pub mod project;
