pub mod otp;
pub mod store;

pub use otp::OtpService;
pub use store::{CodeCheck, MemoryOtpStore, OtpStore, RedisOtpStore};
