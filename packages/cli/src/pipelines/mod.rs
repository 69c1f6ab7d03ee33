//! One module per subcommand. Each is a straight batch job:
//! fetch, clean, aggregate, render.

pub mod entropy;
pub mod location_heatmap;
pub mod needles;
pub mod permits;

use std::path::{Path, PathBuf};

use hotspot_cli_utils::{FetchBar, MultiProgress};
use hotspot_source::PagingConfig;
use hotspot_source::RemoteSource;
use hotspot_source::ckan::CkanSqlClient;

use crate::config::RemoteConfig;

/// A CKAN-backed source with its own progress bar.
pub fn remote_source(
    remote: &RemoteConfig,
    paging: PagingConfig,
    multi: &MultiProgress,
    id: &str,
) -> RemoteSource<CkanSqlClient> {
    let client = CkanSqlClient::new(remote.api_url.as_str()).with_retry(paging.retry.clone());
    RemoteSource::new(id, client)
        .with_paging(paging)
        .with_progress(FetchBar::new(multi, id))
}

/// `--output` if given, otherwise the pipeline's configured file.
pub fn output_path(overridden: Option<&Path>, configured: &Path) -> PathBuf {
    overridden.unwrap_or(configured).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_override_wins() {
        let configured = Path::new("crime_heatmap.html");
        assert_eq!(output_path(None, configured), configured);
        assert_eq!(
            output_path(Some(Path::new("out/map.html")), configured),
            PathBuf::from("out/map.html")
        );
    }
}
