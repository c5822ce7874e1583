mod pose;
mod rotation;

pub use pose::Pose;
pub use rotation::{MIN_ROTATION_ANGLE, Rotation};
