//! Built-in detector image format implementations.

mod raxis;
mod xsd;

#[cfg(test)]
mod tests;

pub use raxis::{
    FIELD_PM_RATIO, FIELD_X_PIXELS, FIELD_Y_PIXELS, RAXIS_HEADER_LEN, RAXIS_PIXEL_TYPE,
    RAXIS_SCHEMA, RaxisDecoder,
};
pub use xsd::{Coding, DEFAULT_ELEMENT_TYPE, DEFAULT_PAYLOAD_ORDER, XsdDecoder, parse_dtype};
