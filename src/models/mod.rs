// Domain models: sample rows, kinds, aggregated results and facade views

mod aggregation;
mod client;
mod device;
mod kind;
mod views;
mod wan;

pub use aggregation::{BucketedSeries, RatePair, WindowedRate};
pub use client::{ClientBandwidthSample, ClientMetric};
pub use device::{DEVICE_STATE_CONNECTED, DeviceHealthSample, DeviceMetric};
pub use kind::{CollectedBatch, IdentityFilter, Sample, SampleKind};
pub use views::{
    ClientDetailView, DashboardView, DeviceDetailView, RealtimeRate, TopConsumer, WanDetailView,
};
pub use wan::{WanMetric, WanStatsSample};
