//! Mapping of an assembled dataset onto the files WRF-Chem expects.

use super::{AttributeValue, EmissionsDataset};
use crate::config::SPLIT_12H_FRAMES;
use crate::domain::{AasError, AasResult, IoStyle};
use std::path::{Path, PathBuf};

const HALF_DAY: usize = SPLIT_12H_FRAMES / 2;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub dataset: EmissionsDataset,
}

/// Splits and names `dataset` for `style`.
///
/// `Single` writes to `output_name` itself. The other styles treat
/// `output_name` as a directory and name files `wrfchemi_dNN_00z`/`_12z` or
/// `wrfchemi_dNN_<first time>`, taking NN from the GRID_ID global.
pub fn plan_output_files(
    style: IoStyle,
    output_name: &Path,
    dataset: EmissionsDataset,
) -> AasResult<Vec<OutputFile>> {
    match style {
        IoStyle::Single => Ok(vec![OutputFile {
            path: output_name.to_path_buf(),
            dataset,
        }]),
        IoStyle::Split12h => {
            if dataset.n_times() != SPLIT_12H_FRAMES {
                return Err(AasError::config(
                    "CONFIG.IO_STYLE",
                    format!(
                        "io_style split_12h needs exactly {} hourly frames, the dataset has {}",
                        SPLIT_12H_FRAMES,
                        dataset.n_times()
                    ),
                ));
            }
            let domain = domain_tag(&dataset)?;
            let morning = dataset.select_frames(0..HALF_DAY)?;
            let evening = dataset.select_frames(HALF_DAY..SPLIT_12H_FRAMES)?;
            Ok(vec![
                OutputFile {
                    path: output_name.join(format!("wrfchemi_{}_00z", domain)),
                    dataset: morning,
                },
                OutputFile {
                    path: output_name.join(format!("wrfchemi_{}_12z", domain)),
                    dataset: evening,
                },
            ])
        }
        IoStyle::Dated => {
            let domain = domain_tag(&dataset)?;
            let first = dataset.times.first().cloned().ok_or_else(|| {
                AasError::internal("SYS.FRAME_SLOT", "dataset has no time levels to name the file")
            })?;
            Ok(vec![OutputFile {
                path: output_name.join(format!("wrfchemi_{}_{}", domain, first)),
                dataset,
            }])
        }
    }
}

fn domain_tag(dataset: &EmissionsDataset) -> AasResult<String> {
    match dataset.global_attributes.get("GRID_ID") {
        Some(AttributeValue::Int(id)) if *id > 0 => Ok(format!("d{:02}", id)),
        Some(AttributeValue::Ints(ids)) if ids.len() == 1 && ids[0] > 0 => {
            Ok(format!("d{:02}", ids[0]))
        }
        _ => Err(AasError::io(
            "IO.TEMPLATE_FIELD",
            "template has no positive integer GRID_ID to name the output files",
        )),
    }
}
