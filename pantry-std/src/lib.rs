//! Pantry Standard Library
//!
//! Reusable cookers for any record whose key has a display form.

pub mod composites;
pub mod cookers;
pub mod names;

use pantry_plugin::prelude::*;
use std::fmt::Display;

/// Path of a standard source cooker for `source`
pub fn source_cooker_path(source: &SourceId, name: &str) -> Result<CookerPath, PantryError> {
    Ok(CookerPath::for_source(source, CookerId::new(name)?))
}

/// Path of the standard key share composite for `source`.
///
/// Composites are source-independent, so the source is folded into the name.
pub fn key_share_path(source: &SourceId) -> Result<CookerPath, PantryError> {
    Ok(CookerPath::composite(format!("{}_{}", source, names::KEY_SHARE))?)
}

/// Register the standard cookers for `source`
pub fn load_standard_cookers<R>(
    registry: CookerRegistry<R>,
    source: &SourceId,
) -> Result<CookerRegistry<R>, PantryError>
where
    R: KeyedRecord + 'static,
    R::Key: Display,
{
    let counter = source_cooker_path(source, names::RECORD_COUNTER)?;
    let histogram = source_cooker_path(source, names::KEY_HISTOGRAM)?;
    let range = source_cooker_path(source, names::INDEX_RANGE)?;
    let share = key_share_path(source)?;

    let counter_factory = {
        let meta = CookerMeta::source(counter.clone(), "Counts every record", &cookers::COUNTER_OUTPUTS);
        FnFactory::new(meta, move || {
            Box::new(cookers::RecordCounter::<R::Key>::new(counter.clone(), KeyInterest::All)) as Box<dyn SourceCooker<R>>
        })
    };
    let histogram_factory = {
        let meta = CookerMeta::source(histogram.clone(), "Counts records per key", &cookers::HISTOGRAM_OUTPUTS);
        let histogram = histogram.clone();
        FnFactory::new(meta, move || {
            Box::new(cookers::KeyHistogram::<R::Key>::new(histogram.clone())) as Box<dyn SourceCooker<R>>
        })
    };
    let range_factory = {
        let meta = CookerMeta::source(range.clone(), "First and last record index", &cookers::RANGE_OUTPUTS);
        FnFactory::new(meta, move || Box::new(cookers::IndexRange::new(range.clone())) as Box<dyn SourceCooker<R>>)
    };
    let share_factory = {
        let meta = CookerMeta::composite(
            share.clone(),
            "Fraction of records per key",
            vec![histogram.clone()],
            &composites::SHARE_OUTPUTS,
        );
        FnFactory::new(meta, move || {
            Box::new(composites::KeyShare::new(share.clone(), histogram.clone())) as Box<dyn CompositeCooker>
        })
    };

    registry
        .with_source_cooker(counter_factory)?
        .with_source_cooker(histogram_factory)?
        .with_source_cooker(range_factory)?
        .with_composite_cooker(share_factory)
}

/// Registry holding the standard cookers of `source`
pub fn standard_registry<R>(source: &SourceId) -> Result<CookerRegistry<R>, PantryError>
where
    R: KeyedRecord + 'static,
    R::Key: Display,
{
    load_standard_cookers(CookerRegistry::new(), source)
}
