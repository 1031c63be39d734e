pub mod authorization;
pub mod health;
