mod request_send;
mod token_guard_ensure;
