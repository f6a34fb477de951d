pub mod appointment;
pub mod clinical;
pub mod enums;
pub mod equipment;
pub mod feedback;
pub mod money;
pub mod user;

pub use appointment::*;
pub use clinical::*;
pub use enums::*;
pub use equipment::*;
pub use feedback::*;
pub use money::*;
pub use user::*;
