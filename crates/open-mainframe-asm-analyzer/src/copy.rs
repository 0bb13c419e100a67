//! COPY member resolution.
//!
//! A COPY statement names a catalog member whose records are spliced into
//! the pending-line queue in place of the statement. Each spliced line
//! carries the include chain it was reached through, so a member that
//! copies itself (directly or via others) is caught without any shared
//! mutable stack.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::catalog::{FileCatalog, SourceFile};
use crate::config::AnalyzerConfig;
use crate::continuation::{join_lines, LogicalLine};
use crate::error::CopyError;
use crate::operand::split_operands;
use crate::statement::Statement;

/// Upper-cased member names, outermost first.
pub type IncludeChain = Rc<Vec<String>>;

/// Records of a resolved member, ready to be queued.
#[derive(Debug, Clone)]
pub struct CopiedMember {
    /// Catalog name of the member.
    pub file_name: String,
    pub lines: Vec<LogicalLine>,
    /// Physical records consumed, for synthetic line numbering.
    pub record_count: usize,
}

/// Resolves COPY statements against a [`FileCatalog`].
#[derive(Debug, Clone)]
pub struct CopyResolver {
    extensions: Vec<String>,
    max_depth: usize,
}

impl Default for CopyResolver {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl CopyResolver {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            extensions: config.copy_extensions.clone(),
            max_depth: config.max_copy_depth,
        }
    }

    /// First comma-delimited operand of a COPY statement.
    pub fn member_name(stmt: &Statement) -> Option<String> {
        let text = stmt.operands();
        let first = split_operands(text)
            .ok()
            .and_then(|parts| parts.into_iter().next())
            .or_else(|| text.split(',').next().map(str::to_string))?;
        let name = first.trim().trim_matches('\'').trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Find a member: exact name, then with each configured extension, then
    /// by stem, then the first member whose stem contains the name.
    pub fn locate<'c>(&self, name: &str, catalog: &'c dyn FileCatalog) -> Option<&'c SourceFile> {
        let name = name.trim();
        if let Some(file) = catalog.find(name) {
            return Some(file);
        }
        for ext in &self.extensions {
            if let Some(file) = catalog.find(&format!("{name}{ext}")) {
                return Some(file);
            }
        }
        let upper = name.to_uppercase();
        let files = catalog.list();
        files
            .iter()
            .find(|f| f.stem() == upper)
            .or_else(|| files.iter().find(|f| f.stem().contains(&upper)))
            .copied()
    }

    /// Resolve the COPY statement `stmt`, reached through `chain`.
    ///
    /// Spliced lines are numbered from `first_line_number` on.
    pub fn resolve(
        &self,
        stmt: &Statement,
        chain: &IncludeChain,
        first_line_number: usize,
        catalog: &dyn FileCatalog,
    ) -> Result<CopiedMember, CopyError> {
        let name = Self::member_name(stmt).ok_or(CopyError::MissingName)?;

        let Some(file) = self.locate(&name, catalog) else {
            warn!(member = %name, line = stmt.line_number, "COPY member not found");
            return Err(CopyError::NotFound { name });
        };

        let key = file.stem();
        if chain.iter().any(|c| *c == key) {
            let mut path: Vec<&str> = chain.iter().map(String::as_str).collect();
            path.push(&key);
            return Err(CopyError::Circular {
                name: key.clone(),
                chain: path.join(" -> "),
            });
        }
        if chain.len() >= self.max_depth {
            return Err(CopyError::DepthExceeded {
                name: key,
                max: self.max_depth,
            });
        }

        let mut nested = chain.to_vec();
        nested.push(key);
        let nested: IncludeChain = Rc::new(nested);

        let records = file.lines();
        let lines = join_lines(&records, first_line_number)
            .into_iter()
            .map(|l| {
                let source_line = l.line_number - first_line_number + 1;
                l.with_source(&file.name, source_line, Rc::clone(&nested))
            })
            .collect();

        debug!(
            member = %file.name,
            records = records.len(),
            depth = nested.len(),
            first_line = first_line_number,
            "COPY member spliced"
        );

        Ok(CopiedMember {
            file_name: file.name.clone(),
            lines,
            record_count: records.len(),
        })
    }
}
