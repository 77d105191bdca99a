// Purpose - the real-time delivery boundary between the synth and a device

pub mod audio;
#[cfg(feature = "device")]
pub mod device;
