//! Export sinks for assembled tables and graphs.

mod csv_file;
mod gexf;

pub use csv_file::write_csv;
pub use gexf::{write_gexf, GexfError};

use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::graph::Graph;
use crate::table::Table;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Timestamp format of run directories.
pub const RUN_DIRECTORY_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Receives the artifacts of a run.
#[cfg_attr(test, mockall::automock)]
pub trait ExportSink: Send + Sync {
    /// Writes one table.
    fn write_table(&self, table: &Table) -> ScrapeResult<()>;

    /// Writes one graph.
    fn write_graph(&self, graph: &Graph) -> ScrapeResult<()>;
}

/// Where the files of one run go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    directory: PathBuf,
}

impl OutputLayout {
    /// Uses a directory as is.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// A directory under `root` named after the run's start time.
    pub fn timestamped(root: impl AsRef<Path>, started: DateTime<Local>) -> Self {
        Self::new(
            root.as_ref()
                .join(started.format(RUN_DIRECTORY_FORMAT).to_string()),
        )
    }

    /// Gets the run directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of a table file.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", name))
    }

    /// Path of a graph file.
    pub fn graph_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.gexf", name))
    }
}

/// Writes CSV and GEXF files into a run directory.
#[derive(Debug)]
pub struct FileSink {
    layout: OutputLayout,
}

impl FileSink {
    /// Creates the run directory and a sink writing into it.
    pub fn create(layout: OutputLayout) -> ScrapeResult<Self> {
        std::fs::create_dir_all(layout.directory())
            .map_err(|e| ScrapeError::io(layout.directory(), e))?;
        Ok(Self { layout })
    }

    /// Gets the layout.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    fn open(path: &Path) -> ScrapeResult<BufWriter<File>> {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|e| ScrapeError::io(path, e))
    }
}

fn serialization_error(path: &Path, cause: impl std::error::Error + Send + Sync + 'static) -> ScrapeError {
    ScrapeError::new(
        ScrapeErrorKind::Serialization,
        format!("Failed to serialize {}", path.display()),
    )
    .with_cause(cause)
}

impl ExportSink for FileSink {
    fn write_table(&self, table: &Table) -> ScrapeResult<()> {
        let path = self.layout.table_path(table.name());
        let file = Self::open(&path)?;
        write_csv(table, file).map_err(|e| serialization_error(&path, e))?;
        info!(path = %path.display(), rows = table.len(), "file saved as {}", path.display());
        Ok(())
    }

    fn write_graph(&self, graph: &Graph) -> ScrapeResult<()> {
        let path = self.layout.graph_path(graph.name());
        let file = Self::open(&path)?;
        write_gexf(graph, file).map_err(|e| serialization_error(&path, e))?;
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "file saved as {}",
            path.display()
        );
        Ok(())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<Vec<Table>>,
    graphs: Mutex<Vec<Graph>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a written table by name.
    pub fn table(&self, name: &str) -> Option<Table> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// Gets a written graph by name.
    pub fn graph(&self, name: &str) -> Option<Graph> {
        self.graphs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|g| g.name() == name)
            .cloned()
    }

    /// Names of written tables, in write order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Names of written graphs, in write order.
    pub fn graph_names(&self) -> Vec<String> {
        self.graphs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|g| g.name().to_string())
            .collect()
    }
}

impl ExportSink for MemorySink {
    fn write_table(&self, table: &Table) -> ScrapeResult<()> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(table.clone());
        Ok(())
    }

    fn write_graph(&self, graph: &Graph) -> ScrapeResult<()> {
        self.graphs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(graph.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attributes;
    use crate::types::Entity;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_timestamped_layout() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let layout = OutputLayout::timestamped("data", started);

        assert_eq!(layout.directory(), Path::new("data/2024-03-09_14-05-07"));
        assert_eq!(
            layout.table_path("org_repositories"),
            PathBuf::from("data/2024-03-09_14-05-07/org_repositories.csv")
        );
        assert_eq!(
            layout.graph_path("full-follower-network"),
            PathBuf::from("data/2024-03-09_14-05-07/full-follower-network.gexf")
        );
    }

    #[test]
    fn test_file_sink_writes_files() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path().join("run"));
        let sink = FileSink::create(layout.clone()).unwrap();

        let mut table = Table::new("members_info", &["login"]);
        table.extend(&[Entity::from_value(json!({"login": "alice"})).unwrap()]);
        sink.write_table(&table).unwrap();

        let mut graph = Graph::new("membership_network");
        graph.add_edge("alice", "acme", attributes([("organization", "acme")]));
        sink.write_graph(&graph).unwrap();

        let csv = std::fs::read_to_string(layout.table_path("members_info")).unwrap();
        assert_eq!(csv, "login\nalice\n");
        let gexf = std::fs::read_to_string(layout.graph_path("membership_network")).unwrap();
        assert!(gexf.contains(r#"source="alice" target="acme""#));
    }

    #[test]
    fn test_file_sink_reports_path_on_failure() {
        let root = tempfile::tempdir().unwrap();
        let sink = FileSink::create(OutputLayout::new(root.path())).unwrap();
        std::fs::create_dir(root.path().join("blocked.csv")).unwrap();

        let err = sink.write_table(&Table::new("blocked", &["a"])).unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::Io);
        assert!(err.is_fatal());
        assert!(err.message().contains("blocked.csv"));
    }

    #[test]
    fn test_memory_sink_keeps_artifacts() {
        let sink = MemorySink::new();
        sink.write_table(&Table::new("t", &["a"])).unwrap();
        sink.write_graph(&Graph::new("g")).unwrap();

        assert_eq!(sink.table_names(), vec!["t"]);
        assert_eq!(sink.graph_names(), vec!["g"]);
        assert!(sink.table("t").is_some());
        assert!(sink.graph("missing").is_none());
    }
}
