pub mod history;
pub mod init;
pub mod mistakes;
pub mod session;
pub mod subjects;
pub mod submit;
pub mod trends;
pub mod validate;
pub mod watch;
