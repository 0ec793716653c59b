pub mod admin;
pub mod credential;
pub mod dashboard;
pub mod notification;
pub mod report;
pub mod role;
pub mod staff;
pub mod team;
