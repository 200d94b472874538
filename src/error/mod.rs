pub mod control;
pub mod frame;
pub mod publish;
pub mod recv;

pub use control::ControlError;
pub use frame::FrameError;
pub use publish::PublishError;
pub use recv::RecvError;
