//! Shared synthetic student dataset for integration tests

#![allow(dead_code)]

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub const GENDERS: [&str; 2] = ["female", "male"];
pub const RACES: [&str; 5] = ["group A", "group B", "group C", "group D", "group E"];
pub const EDUCATION: [&str; 6] = [
    "some high school",
    "high school",
    "some college",
    "associate's degree",
    "bachelor's degree",
    "master's degree",
];
pub const LUNCH: [&str; 2] = ["standard", "free/reduced"];
pub const PREP: [&str; 2] = ["none", "completed"];

/// `n` students whose math score depends mostly on reading/writing, lunch
/// and test preparation, with a little seeded noise
pub fn create_student_dataset(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut gender = Vec::with_capacity(n);
    let mut race = Vec::with_capacity(n);
    let mut education = Vec::with_capacity(n);
    let mut lunch = Vec::with_capacity(n);
    let mut prep = Vec::with_capacity(n);
    let mut reading = Vec::with_capacity(n);
    let mut writing = Vec::with_capacity(n);
    let mut math = Vec::with_capacity(n);

    for _ in 0..n {
        let g = *GENDERS.choose(&mut rng).unwrap();
        let l = *LUNCH.choose(&mut rng).unwrap();
        let p = *PREP.choose(&mut rng).unwrap();
        let r: f64 = rng.gen_range(30.0..100.0);
        let w: f64 = (r + rng.gen_range(-8.0..8.0)).clamp(0.0, 100.0);

        let mut m = 0.55 * r + 0.35 * w + rng.gen_range(-3.0..3.0);
        if l == "standard" {
            m += 6.0;
        }
        if p == "completed" {
            m += 3.0;
        }
        if g == "male" {
            m += 4.0;
        }

        gender.push(g);
        race.push(*RACES.choose(&mut rng).unwrap());
        education.push(*EDUCATION.choose(&mut rng).unwrap());
        lunch.push(l);
        prep.push(p);
        reading.push(r.round());
        writing.push(w.round());
        math.push(m.clamp(0.0, 100.0).round());
    }

    df!(
        "gender" => gender,
        "race_ethnicity" => race,
        "parental_level_of_education" => education,
        "lunch" => lunch,
        "test_preparation_course" => prep,
        "reading_score" => reading,
        "writing_score" => writing,
        "math_score" => math,
    )
    .unwrap()
}
