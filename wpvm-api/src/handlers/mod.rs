// Handlers module - Centralizes all request handlers
pub mod ec2;
