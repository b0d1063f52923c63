pub mod school_profile;
pub mod teacher_profile;
