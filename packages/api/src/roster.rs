//! # Roster: search and append over the category documents
//!
//! [`Roster`] owns the two student lists. Reads go through a short TTL cache
//! and never fail as a whole: a list that cannot be fetched or parsed comes
//! back empty with a diagnostic, and the other list is unaffected. Appends
//! skip the cache entirely and run the store's conditional write:
//!
//! 1. fetch the document and its token,
//! 2. add one row at the end of the first table,
//! 3. commit against the token from step 1.
//!
//! A concurrent append that commits in between makes step 3 fail with
//! [`CoreError::Conflict`]. Nothing is retried here.

use std::time::Duration;

use serde::Serialize;
use store::{ContentStore, Repository, StoreError, VersionToken, VersionedDocument};

use crate::cache::ReadCache;
use crate::docx;
use crate::error::{from_update, CoreError};
use crate::models::{Category, NewStudent, StudentRecord};
use crate::records::{extract_records, filter_by_name};
use crate::settings::Documents;

/// New rows always go into the first table of a document.
pub const TARGET_TABLE: usize = 0;

/// A table must have the sequence and name columns to take a row.
const REQUIRED_COLUMNS: usize = 2;

/// Header row of a freshly created category document.
pub const HEADER_ROW: [&str; 3] = ["Nº", "NOME", "OBSERVAÇÃO"];

/// Store paths of the two category documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub passivos: String,
    pub concluintes: String,
}

impl DocumentPaths {
    pub fn path(&self, category: Category) -> &str {
        match category {
            Category::Passivo => &self.passivos,
            Category::Concluinte => &self.concluintes,
        }
    }
}

impl From<&Documents> for DocumentPaths {
    fn from(docs: &Documents) -> Self {
        Self {
            passivos: docs.passivos.clone(),
            concluintes: docs.concluintes.clone(),
        }
    }
}

/// Outcome of reading one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryLoad {
    pub category: Category,
    pub records: Vec<StudentRecord>,
    /// Why `records` is empty when the document could not be read.
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub records: Vec<StudentRecord>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub categories: Vec<CategoryCount>,
    pub total: usize,
    pub diagnostics: Vec<String>,
}

pub struct Roster<S: ContentStore> {
    repo: Repository<S>,
    paths: DocumentPaths,
    cache: ReadCache,
}

impl<S: ContentStore> Roster<S> {
    pub fn new(store: S, paths: DocumentPaths, cache_ttl: Duration) -> Self {
        Self {
            repo: Repository::new(store),
            paths,
            cache: ReadCache::new(cache_ttl),
        }
    }

    pub fn paths(&self) -> &DocumentPaths {
        &self.paths
    }

    /// Records of one category, or none plus a diagnostic.
    pub async fn load(&self, category: Category) -> CategoryLoad {
        let path = self.paths.path(category);
        let outcome = match self.read(path).await {
            Ok(doc) => extract_records(&doc.content, category)
                .map_err(|e| CoreError::from_docx(path, e)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(records) => CategoryLoad {
                category,
                records,
                diagnostic: None,
            },
            Err(e) => {
                tracing::warn!("Could not load {} list from {}: {}", category, path, e);
                CategoryLoad {
                    category,
                    records: Vec::new(),
                    diagnostic: Some(e.to_string()),
                }
            }
        }
    }

    /// Both categories, passivos first.
    pub async fn load_all(&self) -> Vec<CategoryLoad> {
        let mut loads = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            loads.push(self.load(category).await);
        }
        loads
    }

    /// Case-insensitive name search across both categories.
    pub async fn search(&self, query: &str) -> SearchResult {
        let query = query.trim().to_string();
        if query.is_empty() {
            return SearchResult {
                query,
                records: Vec::new(),
                diagnostics: Vec::new(),
            };
        }

        let mut records = Vec::new();
        let mut diagnostics = Vec::new();
        for load in self.load_all().await {
            records.extend(filter_by_name(&load.records, &query).into_iter().cloned());
            diagnostics.extend(load.diagnostic);
        }
        SearchResult {
            query,
            records,
            diagnostics,
        }
    }

    pub async fn dashboard(&self) -> Dashboard {
        let loads = self.load_all().await;
        let categories: Vec<CategoryCount> = loads
            .iter()
            .map(|l| CategoryCount {
                category: l.category,
                count: l.records.len(),
            })
            .collect();
        Dashboard {
            total: categories.iter().map(|c| c.count).sum(),
            categories,
            diagnostics: loads.into_iter().filter_map(|l| l.diagnostic).collect(),
        }
    }

    /// Append one student to the first table of the category's document.
    pub async fn append(
        &self,
        category: Category,
        student: &NewStudent,
    ) -> Result<VersionToken, CoreError> {
        let row = student.validate()?;
        let path = self.paths.path(category);
        let message = format!("Adicionado aluno: {}", row.name);
        let cells = [
            row.sequence_number.as_str(),
            row.name.as_str(),
            row.note.as_str(),
        ];

        let result = self
            .repo
            .update(path, &message, |content| {
                docx::append_row(content, TARGET_TABLE, &cells, REQUIRED_COLUMNS)
                    .map_err(|e| CoreError::from_docx(path, e))
            })
            .await
            .map_err(|e| from_update(path, e));

        match &result {
            Ok(version) => {
                self.cache.invalidate(path);
                tracing::info!("Appended {} to {} ({})", row.name, path, version);
            }
            Err(e @ CoreError::Conflict { .. }) => {
                // whatever is cached predates the winning write
                self.cache.invalidate(path);
                tracing::warn!("Append to {} lost a race: {}", path, e)
            }
            Err(e) => tracing::error!("Append to {} failed: {}", path, e),
        }
        result
    }

    /// Create the category document with a header row if it does not exist.
    /// Returns whether a document was created.
    pub async fn ensure_document(&self, category: Category) -> Result<bool, CoreError> {
        let path = self.paths.path(category);
        match self.repo.fetch(path).await {
            Ok(_) => return Ok(false),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(CoreError::from_read(path, e)),
        }

        let header: Vec<String> = HEADER_ROW.iter().map(|c| c.to_string()).collect();
        let content = docx::build(&[vec![header]]).map_err(|e| CoreError::from_docx(path, e))?;
        let message = format!("Criada lista de {}", category);
        match self.repo.create(path, content, &message).await {
            Ok(version) => {
                self.cache.invalidate(path);
                tracing::info!("Created {} ({})", path, version);
                Ok(true)
            }
            Err(StoreError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(CoreError::from_write(path, e)),
        }
    }

    async fn read(&self, path: &str) -> Result<VersionedDocument, CoreError> {
        if let Some(doc) = self.cache.get(path) {
            return Ok(doc);
        }
        let generation = self.cache.generation(path);
        let doc = self
            .repo
            .fetch(path)
            .await
            .map_err(|e| CoreError::from_read(path, e))?;
        self.cache.insert(path, doc.clone(), generation);
        Ok(doc)
    }
}
