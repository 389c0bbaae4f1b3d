// Native implementations

pub mod dexscreener;
pub mod http;
pub mod pump_fun;
pub mod storage_impl;

pub use dexscreener::DexScreenerClient;
pub use http::NativeHttpClient;
pub use pump_fun::PumpFunClient;
pub use storage_impl::FileStorage;
