pub mod platform_source;

pub use platform_source::PlatformConnectivitySource;
