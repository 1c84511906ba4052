pub mod fake_client;
