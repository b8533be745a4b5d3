mod connection;
mod records;
mod refresh_policy;
mod retry_plan;
