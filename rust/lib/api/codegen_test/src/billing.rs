//! Stand-in for the record types of the `billing` database project, which
//! the sample schema references through `foreign(billing.invoice)`.

use stubgen_runtime::prelude::*;

/// One row of `billing.invoice`. `id` is the key, assigned by the database
/// on insert.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Invoice {
    pub id: i64,
    pub total: f64,
}

impl Invoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Serializable for Invoice {
    fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("Invoice");
        w.write_start(name)?;
        w.write_i64("id", self.id)?;
        w.write_f64("total", self.total)?;
        w.write_end(name)
    }

    fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("Invoice");
        r.read_start(name)?;
        self.id = r.read_i64("id")?;
        self.total = r.read_f64("total")?;
        r.read_end(name)
    }
}

impl Validate for Invoice {
    fn cache_davs(dvc: &mut DavCache) {
        Self::cache_davs_for(dvc, DavMode::All);
    }

    fn cache_davs_for(dvc: &mut DavCache, mode: DavMode) {
        if mode != DavMode::Insert {
            dvc.add_rule("id", Dav::new(DavKind::Min, DavValue::Int(1)));
        }
        if mode != DavMode::KeyOnly {
            dvc.add_rule("total", Dav::new(DavKind::Min, DavValue::Float(0.0)));
        }
    }

    fn validate_davs(&self, dvc: &DavCache) -> Result<(), DavError> {
        dvc.validate("id", &self.id)?;
        dvc.validate("total", &self.total)?;
        Ok(())
    }
}
