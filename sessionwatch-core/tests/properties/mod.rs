mod health_tests;
mod history_tests;
mod monitor_tests;
mod severity_tests;
