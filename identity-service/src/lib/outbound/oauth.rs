pub mod google;

pub use google::GoogleOauthVerifier;
