//! Dashboard session state: loaded data and the selected company.
use std::path::Path;

use crate::error::AppError;
use crate::loader::{load_records, LoadReport};
use crate::normalize::NormalizedRecord;
use crate::search::search_companies;
use crate::types::CompanyWinRate;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    NoCompanySelected,
    CompanySelected {
        tin: String,
        name: String,
    },
}

#[derive(Debug, Default)]
pub struct Session {
    data: Option<Vec<NormalizedRecord>>,
    selection: Selection,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded data. A previous selection may not exist in the new
    /// data, so it is cleared.
    pub fn load(&mut self, path: &Path) -> Result<LoadReport, AppError> {
        let (records, report) = load_records(path)?;
        self.set_data(records);
        Ok(report)
    }

    pub fn set_data(&mut self, records: Vec<NormalizedRecord>) {
        self.data = Some(records);
        self.selection = Selection::NoCompanySelected;
    }

    pub fn data(&self) -> Result<&[NormalizedRecord], AppError> {
        self.data.as_deref().ok_or(AppError::NoData)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_tin(&self) -> Option<&str> {
        match &self.selection {
            Selection::CompanySelected { tin, .. } => Some(tin),
            Selection::NoCompanySelected => None,
        }
    }

    pub fn search(&self, query: &str) -> Result<Vec<CompanyWinRate>, AppError> {
        search_companies(self.data()?, query)
    }

    pub fn select(&mut self, tin: &str) -> Result<&Selection, AppError> {
        let name = self
            .data()?
            .iter()
            .find(|r| r.bidder_id() == Some(tin))
            .and_then(|r| r.bidder_name())
            .map(str::to_string)
            .ok_or_else(|| AppError::UnknownCompany(tin.to_string()))?;
        tracing::info!(tin, %name, "company selected");
        self.selection = Selection::CompanySelected {
            tin: tin.to_string(),
            name,
        };
        Ok(&self.selection)
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::NoCompanySelected;
    }
}
