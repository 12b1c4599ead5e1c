mod attachment;
mod geofence;
mod note;

pub use attachment::*;
pub use geofence::*;
pub use note::*;
