pub mod upload_profile_file;
