pub mod push;
pub mod subscription;
