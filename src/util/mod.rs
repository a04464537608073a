pub mod keyhelper;
