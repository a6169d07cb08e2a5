use super::*;
use crate::downloader::test_helpers::{
    FakeClient, RecordingMessenger, TEST_DOMAINS, create_test_downloader,
    create_test_downloader_with, drain_events,
};
use crate::error::{DownloadError, Error, FailureKind};
use crate::types::Event;
use std::sync::Arc;
use std::time::Duration;
