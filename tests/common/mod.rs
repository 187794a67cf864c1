#![allow(dead_code, unused_imports)]

pub use stackrun_test_utils::{builders, fake_runner, init_tracing, with_timeout};
