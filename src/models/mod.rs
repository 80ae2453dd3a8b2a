pub mod candle;
pub mod direction;
pub mod plan;
pub mod request;
pub mod timeframe;
pub mod venue;

pub use candle::{Candle, CandleSeries};
pub use direction::*;
pub use plan::*;
pub use request::*;
pub use timeframe::Timeframe;
pub use venue::Exchange;
