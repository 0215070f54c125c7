//! Target playback profiles.
//!
//! A `TargetProfile` is the compatibility rule: a pure predicate over a file's
//! extension, codecs and resolution. The default profile describes what a
//! PlayStation 3 plays from a USB drive or DLNA share.

mod rule;

pub use rule::TargetProfile;
