//! Encoders turning structured records into the binary vectors the detector consumes.
//!
//! The detector itself never looks at records. Whatever produces its input only has to honor
//! the [`Encoder`] contract: every call yields exactly `width()` bits, and the width never changes
//! over the encoder's lifetime.

mod mqtt;

pub use mqtt::MqttEncoder;

/// Trait for all encoders.
pub trait Encoder<T: ?Sized> {
    /// Returns the number of bits of every encoding.
    fn width(&self) -> usize;

    /// Encodes a value into a vector of exactly `width()` bits.
    ///
    /// Takes `&mut self` because encoders may assign bit ranges to new fields as they see them.
    fn encode(&mut self, value: &T) -> Vec<bool>;
}
