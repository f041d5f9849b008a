pub mod enrollment;
pub mod invoice;
pub mod notification;
pub mod payment;
pub mod schedule;
pub mod section;
pub mod student;

pub use enrollment::*;
pub use invoice::*;
pub use notification::*;
pub use payment::*;
pub use schedule::*;
pub use section::*;
pub use student::*;
