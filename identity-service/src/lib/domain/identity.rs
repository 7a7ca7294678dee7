pub mod errors;
pub mod lockout;
pub mod models;
pub mod otp;
pub mod ports;
pub mod service;
