//! Chart images: rendering, placeholders and the time-bucketed file cache.

mod cache;
mod canvas;
mod render;

pub use cache::{seconds_left_in_bucket, ChartCache};
pub use render::{error_image, render_chart, RenderOutput};

use std::future::Future;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::Employee;

/// Default freshness window for cached charts, in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// The fixed set of chart identities served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartType {
    Departments,
    Roles,
    Attendance,
    Signatures,
    Combined,
}

impl ChartType {
    pub const ALL: [ChartType; 5] = [
        ChartType::Departments,
        ChartType::Roles,
        ChartType::Attendance,
        ChartType::Signatures,
        ChartType::Combined,
    ];

    /// Label used in cache file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Departments => "departments",
            ChartType::Roles => "roles",
            ChartType::Attendance => "attendance",
            ChartType::Signatures => "signatures",
            ChartType::Combined => "combined",
        }
    }

}

impl FromStr for ChartType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|chart| chart.as_str() == s)
            .ok_or(())
    }
}

/// Where a served image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Read from the cache for the current bucket.
    Cached,
    /// Rendered for this request and written to the cache.
    Rendered,
    /// A "no data" or error placeholder; never cached.
    Placeholder,
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Cached => "hit",
            ImageSource::Rendered => "miss",
            ImageSource::Placeholder => "bypass",
        }
    }
}

/// PNG bytes ready to be served.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub source: ImageSource,
}

impl ChartImage {
    fn placeholder(png: Vec<u8>) -> Self {
        Self {
            png,
            source: ImageSource::Placeholder,
        }
    }
}

/// Serve `chart` from the cache or render it.
///
/// On a miss, `load` fetches the rows and `render` runs on the blocking pool.
/// Any failure along the way (load error, render error, render panic) turns
/// into an error image. Only cacheable renders are stored; a failed store is
/// logged and the fresh image is still returned.
pub async fn produce<L, R>(
    cache: &ChartCache,
    chart: ChartType,
    window_secs: u64,
    load: L,
    render: R,
) -> ChartImage
where
    L: Future<Output = Result<Vec<Employee>, AppError>>,
    R: FnOnce(ChartType, &[Employee]) -> Result<RenderOutput, AppError> + Send + 'static,
{
    if let Some(png) = cache.lookup(chart, window_secs).await {
        return ChartImage {
            png,
            source: ImageSource::Cached,
        };
    }

    let rows = match load.await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to load rows for {} chart: {}", chart.as_str(), e);
            return ChartImage::placeholder(error_image(&e.message()));
        }
    };

    let output = match tokio::task::spawn_blocking(move || render(chart, &rows)).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::error!("Failed to render {} chart: {}", chart.as_str(), e);
            return ChartImage::placeholder(error_image(&e.message()));
        }
        Err(e) => {
            tracing::error!("Render task for {} chart failed: {}", chart.as_str(), e);
            return ChartImage::placeholder(error_image(&panic_message(e)));
        }
    };

    if !output.cacheable {
        return ChartImage::placeholder(output.png);
    }

    match cache.store(chart, window_secs, &output.png).await {
        Ok(report) if report.cleanup_failures > 0 => {
            tracing::warn!(
                chart = chart.as_str(),
                bucket = report.bucket,
                failures = report.cleanup_failures,
                "Stale chart files left behind"
            );
        }
        Ok(report) => {
            tracing::debug!(
                chart = chart.as_str(),
                bucket = report.bucket,
                removed = report.removed,
                "Stored chart"
            );
        }
        Err(e) => tracing::warn!("Failed to cache {} chart: {}", chart.as_str(), e),
    }

    ChartImage {
        png: output.png,
        source: ImageSource::Rendered,
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "render task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn cache_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    async fn no_rows() -> Result<Vec<Employee>, AppError> {
        Ok(Vec::new())
    }

    #[test]
    fn test_chart_type_labels_round_trip() {
        for chart in ChartType::ALL {
            assert_eq!(chart.as_str().parse::<ChartType>(), Ok(chart));
        }
        assert_eq!("payroll".parse::<ChartType>(), Err(()));
        assert_eq!("Roles".parse::<ChartType>(), Err(()));
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        const WINDOW: u64 = 3600;
        let dir = TempDir::new().unwrap();
        let cache = ChartCache::open(dir.path()).await.unwrap();
        let renders = Arc::new(AtomicUsize::new(0));

        let before = cache::bucket_at(SystemTime::now(), WINDOW);
        let mut images = Vec::new();
        for _ in 0..2 {
            let renders = renders.clone();
            let image = produce(&cache, ChartType::Roles, WINDOW, no_rows(), move |_, _| {
                renders.fetch_add(1, Ordering::SeqCst);
                Ok(RenderOutput {
                    png: b"chart".to_vec(),
                    cacheable: true,
                })
            })
            .await;
            images.push(image);
        }
        let after = cache::bucket_at(SystemTime::now(), WINDOW);

        assert_eq!(images[0].source, ImageSource::Rendered);
        // Crossing a bucket boundary mid-test legitimately forces a re-render.
        if before == after {
            assert_eq!(images[1].source, ImageSource::Cached);
            assert_eq!(images[1].png, b"chart");
            assert_eq!(renders.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_render_panic_becomes_uncached_error_image() {
        let dir = TempDir::new().unwrap();
        let cache = ChartCache::open(dir.path()).await.unwrap();

        let image = produce(&cache, ChartType::Signatures, 60, no_rows(), |_, _| {
            panic!("font table missing")
        })
        .await;

        assert_eq!(image.source, ImageSource::Placeholder);
        assert_eq!(&image.png[1..4], b"PNG");
        assert_eq!(cache_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_load_and_render_errors_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = ChartCache::open(dir.path()).await.unwrap();

        let image = produce(
            &cache,
            ChartType::Departments,
            60,
            async { Err(AppError::Database("pool closed".to_string())) },
            render_chart,
        )
        .await;
        assert_eq!(image.source, ImageSource::Placeholder);

        let image = produce(&cache, ChartType::Departments, 60, no_rows(), |_, _| {
            Err(AppError::Render("no canvas".to_string()))
        })
        .await;
        assert_eq!(image.source, ImageSource::Placeholder);

        assert_eq!(cache_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_no_data_placeholder_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let cache = ChartCache::open(dir.path()).await.unwrap();

        let image = produce(&cache, ChartType::Attendance, 60, no_rows(), render_chart).await;

        assert_eq!(image.source, ImageSource::Placeholder);
        assert_eq!(cache_files(dir.path()), 0);
    }
}
