pub mod calendar;
pub mod history;
pub mod init;
pub mod lock;
pub mod record;
pub mod values;
