use crate::error::{PipelineError, Result};
use crate::extract::is_null;
use crate::load::write_csv;
use crate::structs::{AppRecord, ReportRecord, ReviewRecord, TransformConfig};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Builds the top applications report and persists its CSV snapshot.
///
/// Runs [`transform_records`], writes the result to `config.snapshot_path`
/// (overwriting any previous snapshot) and logs the final shape.
///
/// # Arguments
///
/// * `apps` - Application rows in file order, possibly with repeated App values
/// * `reviews` - Review rows in file order, possibly with repeated rows
/// * `config` - Category, thresholds and snapshot location
///
/// # Errors
///
/// Returns `PipelineError::Schema` if a Reviews cell in the selected category
/// is missing or not an integer, `PipelineError::NarrowingOverflow` if it does
/// not fit in an i32, or an I/O / CSV error if the snapshot cannot be written.
pub fn transform(
    apps: &[AppRecord],
    reviews: &[ReviewRecord],
    config: &TransformConfig,
) -> Result<Vec<ReportRecord>> {
    info!(
        "Transforming data to curate a dataset with all {} apps and their corresponding reviews \
         with a rating above {} and more than {} reviews",
        config.category, config.min_rating, config.min_reviews
    );

    let top_apps = transform_records(apps, reviews, config)?;

    write_csv(&top_apps, &config.snapshot_path)?;
    info!(
        "The transformed report, which includes {} rows and {} columns, has been persisted to {}",
        top_apps.len(),
        ReportRecord::COLUMNS.len(),
        config.snapshot_path.display()
    );

    Ok(top_apps)
}

/// The side-effect free part of [`transform`].
///
/// In order: drop duplicate review rows, keep the first row per App, restrict
/// to the category, average the review polarity per App (missing values
/// skipped), left-join the averages onto the apps, project the report columns,
/// narrow Reviews to i32, apply the strict thresholds and sort by Rating then
/// Reviews, both descending. The sort is stable so exact ties keep their order.
pub fn transform_records(
    apps: &[AppRecord],
    reviews: &[ReviewRecord],
    config: &TransformConfig,
) -> Result<Vec<ReportRecord>> {
    let reviews = dedup_reviews(reviews);
    let apps = dedup_apps(apps);
    debug!(
        "{} unique apps and {} unique reviews after deduplication",
        apps.len(),
        reviews.len()
    );

    let subset_apps: Vec<&AppRecord> = apps
        .into_iter()
        .filter(|app| app.category == config.category)
        .collect();
    let subset_names: HashSet<&str> = subset_apps.iter().map(|app| app.app.as_str()).collect();
    let subset_reviews = reviews
        .into_iter()
        .filter(|review| subset_names.contains(review.app.as_str()));

    let polarity = mean_polarity(subset_reviews);
    debug!(
        "{} apps in category {}, {} with review sentiment",
        subset_apps.len(),
        config.category,
        polarity.values().filter(|mean| mean.is_some()).count()
    );

    let mut top_apps = Vec::new();
    for app in subset_apps {
        let sentiment_polarity = polarity.get(app.app.as_str()).copied().flatten();
        let reviews = narrow_reviews(app)?;

        let Some(rating) = app.rating else {
            continue;
        };
        if rating > config.min_rating && f64::from(reviews) > config.min_reviews {
            top_apps.push(ReportRecord {
                app: app.app.clone(),
                rating,
                reviews,
                installs: app.installs.clone(),
                sentiment_polarity,
            });
        }
    }

    top_apps.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then_with(|| b.reviews.cmp(&a.reviews))
    });

    Ok(top_apps)
}

/// Keeps the first occurrence of every distinct review row.
fn dedup_reviews(reviews: &[ReviewRecord]) -> Vec<&ReviewRecord> {
    let mut seen = HashSet::new();
    reviews
        .iter()
        .filter(|review| {
            seen.insert((
                review.app.as_str(),
                review.sentiment_polarity.map(float_key),
                review.extra.as_slice(),
            ))
        })
        .collect()
}

/// Keeps the first row for each App value.
fn dedup_apps(apps: &[AppRecord]) -> Vec<&AppRecord> {
    let mut seen = HashSet::new();
    apps.iter().filter(|app| seen.insert(app.app.as_str())).collect()
}

// 0.0 and -0.0 compare equal, so they must hash alike.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Mean polarity per App. Missing polarities count toward neither the sum nor
/// the count, so a group with only missing values maps to `None`.
fn mean_polarity<'a>(
    reviews: impl Iterator<Item = &'a ReviewRecord>,
) -> HashMap<&'a str, Option<f64>> {
    let mut groups: HashMap<&str, (f64, usize)> = HashMap::new();
    for review in reviews {
        let (sum, count) = groups.entry(review.app.as_str()).or_insert((0.0, 0));
        if let Some(value) = review.sentiment_polarity {
            *sum += value;
            *count += 1;
        }
    }

    groups
        .into_iter()
        .map(|(app, (sum, count))| {
            let mean = (count > 0).then(|| sum / count as f64);
            (app, mean)
        })
        .collect()
}

/// Parses the raw Reviews cell and narrows it to i32. Integral floats such as
/// `1500.0` are accepted; anything else non-integer is a schema error.
fn narrow_reviews(app: &AppRecord) -> Result<i32> {
    let cell = app.reviews.trim();
    if is_null(cell) {
        return Err(PipelineError::schema(
            "apps",
            format!("missing value in column 'Reviews' for app '{}'", app.app),
        ));
    }

    let value = match cell.parse::<i64>() {
        Ok(value) => value,
        Err(_) => match cell.parse::<f64>() {
            Ok(value)
                if value.is_finite()
                    && value.fract() == 0.0
                    && value >= i64::MIN as f64
                    && value < i64::MAX as f64 =>
            {
                value as i64
            }
            _ => {
                return Err(PipelineError::schema(
                    "apps",
                    format!(
                        "non-numeric value '{}' in column 'Reviews' for app '{}'",
                        app.reviews, app.app
                    ),
                ));
            }
        },
    };

    i32::try_from(value).map_err(|_| PipelineError::NarrowingOverflow {
        app: app.app.clone(),
        value,
    })
}
