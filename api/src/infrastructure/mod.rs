pub mod crypto;
pub mod db;
pub mod email;
pub mod storage;
