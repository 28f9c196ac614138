//! The Review Aggregator.
//!
//! Rating-threshold filtering, four explicit sort orders, single-pass
//! aggregate statistics, and the one-review-per-pair creation workflow.
//! Statistics are always computed over the unfiltered review table, so the
//! headline numbers do not shift as the visitor narrows the listing.

use std::collections::HashSet;

use serde::Serialize;
use studybuddy_shared::constants::{MAX_RATING, MIN_RATING, REVIEWS_PAGE_SIZE};
use studybuddy_shared::UserId;
use studybuddy_store::{Database, Review, StoreError};

use crate::error::{CoreError, Result};

/// Sort order for the reviews listing.  Ties on rating are broken by newest
/// creation time so the result is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

impl ReviewSort {
    /// Parse a query-string sort key.  Unrecognized keys fall back to
    /// `Newest` rather than erroring.
    pub fn from_key(key: &str) -> Self {
        match key {
            "oldest" => ReviewSort::Oldest,
            "highest" => ReviewSort::Highest,
            "lowest" => ReviewSort::Lowest,
            _ => ReviewSort::Newest,
        }
    }
}

/// Filter, sort and page selection for [`list_reviews`].
#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    /// Keep only reviews with `rating >= min_rating`.  `None` means no
    /// filter (unparseable caller input is treated the same way).
    pub min_rating: Option<i64>,
    pub sort: ReviewSort,
    /// 1-based page number; out-of-range values are clamped.
    pub page: usize,
}

/// Aggregate statistics over the full (unfiltered) review table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    /// Arithmetic mean rating; 0 when there are no reviews.
    pub average_rating: f64,
    pub five_star: usize,
    pub distinct_reviewers: usize,
}

/// One page of the reviews listing plus the table-wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub stats: ReviewStats,
    pub page: usize,
    pub total_pages: usize,
}

/// Compute aggregate statistics in a single pass.
pub fn compute_stats(reviews: &[Review]) -> ReviewStats {
    let mut sum = 0i64;
    let mut five_star = 0usize;
    let mut reviewers: HashSet<UserId> = HashSet::new();

    for review in reviews {
        sum += review.rating;
        if review.rating == MAX_RATING {
            five_star += 1;
        }
        reviewers.insert(review.reviewer);
    }

    let total = reviews.len();
    let average_rating = if total == 0 {
        0.0
    } else {
        sum as f64 / total as f64
    };

    ReviewStats {
        total,
        average_rating,
        five_star,
        distinct_reviewers: reviewers.len(),
    }
}

/// Sort reviews in place according to the requested order.
pub fn sort_reviews(reviews: &mut [Review], sort: ReviewSort) {
    match sort {
        ReviewSort::Newest => {
            reviews.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
        }
        ReviewSort::Oldest => {
            reviews.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
        }
        ReviewSort::Highest => reviews.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then((b.created_at, b.id).cmp(&(a.created_at, a.id)))
        }),
        ReviewSort::Lowest => reviews.sort_by(|a, b| {
            a.rating
                .cmp(&b.rating)
                .then((b.created_at, b.id).cmp(&(a.created_at, a.id)))
        }),
    }
}

/// Build the reviews listing read-model: statistics over the full table,
/// then the filtered, sorted, paginated slice.
pub fn list_reviews(db: &Database, query: &ReviewQuery) -> Result<ReviewPage> {
    let all = db.list_reviews()?;
    let stats = compute_stats(&all);

    let mut filtered: Vec<Review> = match query.min_rating {
        Some(min) => all.into_iter().filter(|r| r.rating >= min).collect(),
        None => all,
    };
    sort_reviews(&mut filtered, query.sort);

    let total_pages = filtered.len().div_ceil(REVIEWS_PAGE_SIZE);
    let page = query.page.max(1).min(total_pages.max(1));
    let start = (page - 1) * REVIEWS_PAGE_SIZE;
    let reviews = filtered
        .into_iter()
        .skip(start)
        .take(REVIEWS_PAGE_SIZE)
        .collect();

    Ok(ReviewPage {
        reviews,
        stats,
        page,
        total_pages,
    })
}

/// Persist a review from `reviewer` on `reviewed`.
///
/// Self-review and out-of-range ratings are declined as invalid input.  A
/// second review for the same ordered pair is declined as a duplicate, even
/// under concurrent submission, leaving the original untouched.  On success
/// the reviewed user's cached profile rating is recomputed.
pub fn create_review(
    db: &Database,
    reviewer: UserId,
    reviewed: UserId,
    rating: i64,
    comment: Option<String>,
) -> Result<Review> {
    if reviewer == reviewed {
        return Err(CoreError::InvalidInput("cannot review yourself".into()));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::InvalidInput(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }

    db.get_user(reviewer)?;
    db.get_user(reviewed)?;

    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let review = Review::new(reviewer, reviewed, rating, comment);
    db.insert_review(&review).map_err(|e| match e {
        StoreError::Duplicate => CoreError::Duplicate("you have already reviewed this user".into()),
        other => other.into(),
    })?;

    refresh_cached_rating(db, reviewed)?;
    tracing::debug!(reviewer = %reviewer, reviewed = %reviewed, rating, "review created");
    Ok(review)
}

/// Recompute the cached mean rating on the reviewed user's profile, if they
/// have one.  Users without a profile simply skip the cache.
fn refresh_cached_rating(db: &Database, reviewed: UserId) -> Result<()> {
    let received = db.list_reviews_for_user(reviewed)?;
    let mean = compute_stats_for_user(&received);

    match db.get_profile_for_user(reviewed) {
        Ok(profile) => {
            db.set_profile_rating(profile.id, mean)?;
            Ok(())
        }
        Err(StoreError::NotFound) => Ok(()),
        Err(other) => Err(other.into()),
    }
}

fn compute_stats_for_user(received: &[Review]) -> f64 {
    if received.is_empty() {
        return 0.0;
    }
    received.iter().map(|r| r.rating).sum::<i64>() as f64 / received.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use studybuddy_store::User;

    fn user(db: &Database, name: &str) -> UserId {
        let u = User::new(name.into(), format!("{name}@school.edu"), "hash".into());
        db.create_user(&u).unwrap();
        u.id
    }

    fn review_at(reviewer: UserId, reviewed: UserId, rating: i64, minutes_ago: i64) -> Review {
        let mut r = Review::new(reviewer, reviewed, rating, None);
        r.created_at = Utc::now() - Duration::minutes(minutes_ago);
        r
    }

    #[test]
    fn stats_for_known_ratings() {
        let target = UserId::new();
        let reviews = vec![
            review_at(UserId::new(), target, 5, 40),
            review_at(UserId::new(), target, 5, 30),
            review_at(UserId::new(), target, 3, 20),
            review_at(UserId::new(), target, 1, 10),
        ];

        let stats = compute_stats(&reviews);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.average_rating, 3.5);
        assert_eq!(stats.five_star, 2);
        assert_eq!(stats.distinct_reviewers, 4);
    }

    #[test]
    fn stats_for_empty_table_avoid_division_by_zero() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_rating, 0.0);
    }

    #[test]
    fn repeat_reviewer_counts_once() {
        let prolific = UserId::new();
        let reviews = vec![
            review_at(prolific, UserId::new(), 4, 20),
            review_at(prolific, UserId::new(), 2, 10),
        ];
        assert_eq!(compute_stats(&reviews).distinct_reviewers, 1);
    }

    #[test]
    fn highest_sort_is_non_increasing_with_newest_tiebreak() {
        let mut reviews = vec![
            review_at(UserId::new(), UserId::new(), 3, 30),
            review_at(UserId::new(), UserId::new(), 5, 20),
            review_at(UserId::new(), UserId::new(), 5, 40),
            review_at(UserId::new(), UserId::new(), 1, 10),
        ];
        sort_reviews(&mut reviews, ReviewSort::Highest);

        let ratings: Vec<i64> = reviews.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![5, 5, 3, 1]);
        // Among the two 5-star reviews the newer one comes first.
        assert!(reviews[0].created_at > reviews[1].created_at);
    }

    #[test]
    fn lowest_sort_is_non_decreasing() {
        let mut reviews = vec![
            review_at(UserId::new(), UserId::new(), 4, 30),
            review_at(UserId::new(), UserId::new(), 1, 20),
            review_at(UserId::new(), UserId::new(), 2, 10),
        ];
        sort_reviews(&mut reviews, ReviewSort::Lowest);
        let ratings: Vec<i64> = reviews.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![1, 2, 4]);
    }

    #[test]
    fn unknown_sort_key_defaults_to_newest() {
        assert_eq!(ReviewSort::from_key("bogus"), ReviewSort::Newest);
        assert_eq!(ReviewSort::from_key("highest"), ReviewSort::Highest);
    }

    #[test]
    fn min_rating_filters_but_stats_stay_global() {
        let db = Database::open_in_memory().unwrap();
        let target = user(&db, "target");
        for (i, rating) in [5, 5, 3, 1].into_iter().enumerate() {
            let reviewer = user(&db, &format!("reviewer{i}"));
            db.insert_review(&Review::new(reviewer, target, rating, None))
                .unwrap();
        }

        let page = list_reviews(
            &db,
            &ReviewQuery {
                min_rating: Some(4),
                sort: ReviewSort::Newest,
                page: 1,
            },
        )
        .unwrap();

        assert!(page.reviews.iter().all(|r| r.rating >= 4));
        assert_eq!(page.reviews.len(), 2);
        // Statistics cover the unfiltered table.
        assert_eq!(page.stats.total, 4);
        assert_eq!(page.stats.average_rating, 3.5);
        assert_eq!(page.stats.five_star, 2);
    }

    #[test]
    fn pagination_clamps_out_of_range_pages() {
        let db = Database::open_in_memory().unwrap();
        let target = user(&db, "target");
        for i in 0..15 {
            let reviewer = user(&db, &format!("reviewer{i}"));
            db.insert_review(&Review::new(reviewer, target, 4, None))
                .unwrap();
        }

        let page = list_reviews(
            &db,
            &ReviewQuery {
                min_rating: None,
                sort: ReviewSort::Newest,
                page: 99,
            },
        )
        .unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.reviews.len(), 3);
    }

    #[test]
    fn create_review_updates_cached_profile_rating() {
        let mut db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let bob_profile = db.get_or_create_profile(bob).unwrap();

        create_review(&db, alice, bob, 4, Some("solid partner".into())).unwrap();
        assert_eq!(db.get_profile(bob_profile.id).unwrap().rating, 4.0);

        let carol = user(&db, "carol");
        create_review(&db, carol, bob, 2, None).unwrap();
        assert_eq!(db.get_profile(bob_profile.id).unwrap().rating, 3.0);
    }

    #[test]
    fn second_review_is_a_duplicate_and_leaves_original() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        create_review(&db, alice, bob, 5, None).unwrap();
        let err = create_review(&db, alice, bob, 1, None).unwrap_err();
        assert!(matches!(err, CoreError::Duplicate(_)));

        let stored = db.list_reviews_for_user(bob).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rating, 5);
    }

    #[test]
    fn self_review_and_bad_rating_are_invalid() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        assert!(matches!(
            create_review(&db, alice, alice, 5, None).unwrap_err(),
            CoreError::InvalidInput(_)
        ));
        assert!(matches!(
            create_review(&db, alice, bob, 0, None).unwrap_err(),
            CoreError::InvalidInput(_)
        ));
        assert!(matches!(
            create_review(&db, alice, bob, 6, None).unwrap_err(),
            CoreError::InvalidInput(_)
        ));
    }
}
