pub mod health;
pub mod revoke;
