//! Validated request bodies for catalogue operations
//!
//! Required fields are `Option`s so a missing field surfaces as
//! `MissingField` from validation instead of a deserialisation failure.

use crate::catalog::movie::{MovieDetails, Rating};
use crate::catalog::Movie;
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::MissingField {
        field: field.to_string(),
    })
}

fn non_blank(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            message: format!("{} must not be blank", field),
            field: Some(field.to_string()),
        });
    }
    Ok(trimmed.to_string())
}

fn clean_cast(cast: Vec<String>) -> Result<Vec<String>> {
    let cast: Vec<String> = cast
        .into_iter()
        .map(|member| member.trim().to_string())
        .filter(|member| !member.is_empty())
        .collect();

    if cast.is_empty() {
        return Err(AppError::Validation {
            message: "cast must list at least one member".to_string(),
            field: Some("cast".to_string()),
        });
    }
    Ok(cast)
}

/// Body of an admin movie creation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    #[validate(required, length(min = 1, max = 300))]
    pub name: Option<String>,

    #[validate(required, range(min = 1870, max = 2200))]
    pub year: Option<i32>,

    #[validate(required)]
    pub release_date: Option<NaiveDate>,

    #[validate(required, length(min = 1, max = 10000))]
    pub detail: Option<String>,

    #[validate(required)]
    pub genre: Option<Uuid>,

    #[validate(required, length(min = 1, max = 200))]
    pub cast: Option<Vec<String>>,

    #[validate(required, length(min = 1, max = 2048))]
    pub streaming_link: Option<String>,

    #[validate(length(min = 1, max = 2048))]
    pub image: Option<String>,
}

impl NewMovie {
    /// Validate and convert into the descriptive fields of a new movie
    pub fn into_details(self) -> Result<MovieDetails> {
        self.validate()?;

        Ok(MovieDetails {
            name: non_blank(required(self.name, "name")?, "name")?,
            detail: non_blank(required(self.detail, "detail")?, "detail")?,
            release_date: required(self.release_date, "releaseDate")?,
            year: required(self.year, "year")?,
            genre: required(self.genre, "genre")?,
            cast: clean_cast(required(self.cast, "cast")?)?,
            image: self.image.map(|i| non_blank(i, "image")).transpose()?,
            streaming_link: Some(non_blank(
                required(self.streaming_link, "streamingLink")?,
                "streamingLink",
            )?),
        })
    }
}

/// Partial update of a movie's descriptive fields.
///
/// Reviews and their derived values are not part of this body; unknown
/// fields such as `rating` or `numReviews` are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    #[validate(length(min = 1, max = 300))]
    pub name: Option<String>,

    #[validate(range(min = 1870, max = 2200))]
    pub year: Option<i32>,

    pub release_date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 10000))]
    pub detail: Option<String>,

    pub genre: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub cast: Option<Vec<String>>,

    #[validate(length(min = 1, max = 2048))]
    pub streaming_link: Option<String>,

    #[validate(length(min = 1, max = 2048))]
    pub image: Option<String>,
}

impl MovieUpdate {
    /// Merge the provided fields into `details`
    pub fn apply(self, details: &mut MovieDetails) -> Result<()> {
        self.validate()?;

        // Build every replacement first so a late failure leaves `details` intact
        let name = self.name.map(|v| non_blank(v, "name")).transpose()?;
        let detail = self.detail.map(|v| non_blank(v, "detail")).transpose()?;
        let cast = self.cast.map(clean_cast).transpose()?;
        let streaming_link = self
            .streaming_link
            .map(|v| non_blank(v, "streamingLink"))
            .transpose()?;
        let image = self.image.map(|v| non_blank(v, "image")).transpose()?;

        if let Some(name) = name {
            details.name = name;
        }
        if let Some(detail) = detail {
            details.detail = detail;
        }
        if let Some(year) = self.year {
            details.year = year;
        }
        if let Some(release_date) = self.release_date {
            details.release_date = release_date;
        }
        if let Some(genre) = self.genre {
            details.genre = genre;
        }
        if let Some(cast) = cast {
            details.cast = cast;
        }
        if streaming_link.is_some() {
            details.streaming_link = streaming_link;
        }
        if image.is_some() {
            details.image = image;
        }
        Ok(())
    }
}

/// Body of a review submission
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewSubmission {
    #[validate(required)]
    pub rating: Option<i64>,

    #[validate(required, length(min = 1, max = 5000))]
    pub comment: Option<String>,
}

impl ReviewSubmission {
    /// Validate into a rating and a trimmed comment
    pub fn into_parts(self) -> Result<(Rating, String)> {
        self.validate()?;
        let rating = Rating::new(required(self.rating, "rating")?)?;
        let comment = non_blank(required(self.comment, "comment")?, "comment")?;
        Ok((rating, comment))
    }
}

/// Body of an admin genre creation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewGenre {
    #[validate(required, length(min = 1, max = 100))]
    pub name: Option<String>,
}

impl NewGenre {
    pub fn into_name(self) -> Result<String> {
        self.validate()?;
        non_blank(required(self.name, "name")?, "name")
    }
}

/// Optional filters for the full movie listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilter {
    /// Case-insensitive substring of the movie name
    pub search: Option<String>,
    pub genre: Option<Uuid>,
    pub year: Option<i32>,
}

impl MovieFilter {
    /// Search term normalised for matching, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_empty(&self) -> bool {
        self.search_term().is_none() && self.genre.is_none() && self.year.is_none()
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        let details = &movie.details;
        self.search_term()
            .map_or(true, |term| details.name.to_lowercase().contains(&term))
            && self.genre.map_or(true, |genre| details.genre == genre)
            && self.year.map_or(true, |year| details.year == year)
    }
}

/// `?limit=` on the newest/top/random listings
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListingQuery {
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> NewMovie {
        NewMovie {
            name: Some(" Arrival ".into()),
            year: Some(2016),
            release_date: NaiveDate::from_ymd_opt(2016, 11, 11),
            detail: Some("Linguist meets heptapods".into()),
            genre: Some(Uuid::new_v4()),
            cast: Some(vec!["Amy Adams".into(), " ".into(), "Jeremy Renner".into()]),
            streaming_link: Some("https://stream.example/arrival".into()),
            image: None,
        }
    }

    #[test]
    fn test_new_movie_into_details() {
        let details = complete().into_details().unwrap();
        assert_eq!(details.name, "Arrival");
        assert_eq!(details.cast, vec!["Amy Adams", "Jeremy Renner"]);
        assert!(details.image.is_none());
    }

    #[test]
    fn test_new_movie_missing_fields() {
        let cases: Vec<(&str, NewMovie)> = vec![
            ("name", NewMovie { name: None, ..complete() }),
            ("year", NewMovie { year: None, ..complete() }),
            ("release_date", NewMovie { release_date: None, ..complete() }),
            ("detail", NewMovie { detail: None, ..complete() }),
            ("genre", NewMovie { genre: None, ..complete() }),
            ("cast", NewMovie { cast: None, ..complete() }),
            ("streaming_link", NewMovie { streaming_link: None, ..complete() }),
        ];

        for (field, input) in cases {
            match input.into_details() {
                Err(AppError::MissingField { field: got }) => {
                    assert_eq!(got.replace('_', "").to_lowercase(), field.replace('_', ""))
                }
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_new_movie_rejects_empty_cast() {
        let input = NewMovie {
            cast: Some(vec![]),
            ..complete()
        };
        assert!(matches!(input.into_details(), Err(AppError::Validation { .. })));

        let blank = NewMovie {
            cast: Some(vec!["  ".into()]),
            ..complete()
        };
        assert!(matches!(blank.into_details(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let mut details = complete().into_details().unwrap();
        let update = MovieUpdate {
            name: Some("Arrival (2016)".into()),
            year: Some(2017),
            ..Default::default()
        };
        update.apply(&mut details).unwrap();
        assert_eq!(details.name, "Arrival (2016)");
        assert_eq!(details.year, 2017);
        assert_eq!(details.detail, "Linguist meets heptapods");
    }

    #[test]
    fn test_update_failure_leaves_details_intact() {
        let mut details = complete().into_details().unwrap();
        let before = details.clone();
        let update = MovieUpdate {
            name: Some("New name".into()),
            cast: Some(vec![" ".into()]),
            ..Default::default()
        };
        assert!(update.apply(&mut details).is_err());
        assert_eq!(details, before);
    }

    #[test]
    fn test_update_ignores_derived_fields_in_body() {
        let update: MovieUpdate =
            serde_json::from_str(r#"{"rating": 5, "numReviews": 99, "detail": "new"}"#).unwrap();
        assert_eq!(update.detail.as_deref(), Some("new"));
    }

    #[test]
    fn test_review_submission_bounds() {
        let ok = |rating| ReviewSubmission {
            rating: Some(rating),
            comment: Some("fine".into()),
        };
        assert_eq!(ok(1).into_parts().unwrap().0.value(), 1);
        assert_eq!(ok(5).into_parts().unwrap().0.value(), 5);
        assert!(matches!(ok(0).into_parts(), Err(AppError::InvalidRating { value: 0 })));
        assert!(matches!(ok(6).into_parts(), Err(AppError::InvalidRating { value: 6 })));

        let missing = ReviewSubmission {
            rating: None,
            comment: Some("fine".into()),
        };
        assert!(matches!(missing.into_parts(), Err(AppError::MissingField { .. })));
    }

    #[test]
    fn test_review_submission_requires_comment() {
        let blank = ReviewSubmission {
            rating: Some(3),
            comment: Some("   ".into()),
        };
        assert!(matches!(blank.into_parts(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_filter_matching() {
        let details = complete().into_details().unwrap();
        let genre = details.genre;
        let movie = Movie::new(details, chrono::Utc::now());

        assert!(MovieFilter::default().matches(&movie));
        assert!(MovieFilter::default().is_empty());

        let by_name = MovieFilter {
            search: Some("ARRI".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&movie));

        let wrong_year = MovieFilter {
            year: Some(1999),
            genre: Some(genre),
            ..Default::default()
        };
        assert!(!wrong_year.matches(&movie));

        let blank = MovieFilter {
            search: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.is_empty());
    }
}
