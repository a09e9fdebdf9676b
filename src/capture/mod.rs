//! Camera ownership: device acquisition, on-demand stills, idempotent release.

mod device;
mod directory;
mod frame;

pub use device::{CaptureDevice, CaptureHandle, CaptureSource};
pub use directory::DirectoryCamera;
pub use frame::{encode_jpeg, Frame};

#[cfg(test)]
pub(crate) use device::testing;
