#![allow(dead_code)]

use recipe_share_sdk::{
    actions::{ingredients, recipes, tags, users},
    connect_in_memory,
    jwt::SessionData,
    schema::{Id, IngredientAmount, NewRecipe, RecipeDetail},
};
use sqlx::{Pool, Sqlite};

pub struct Fixture {
    pub pool: Pool<Sqlite>,
    pub chef: SessionData,
    pub guest: SessionData,
    pub salt: Id,
    pub flour: Id,
    pub milk: Id,
    pub breakfast: Id,
    pub dinner: Id,
}

pub async fn fixture() -> Fixture {
    let pool = connect_in_memory().await.unwrap();

    let chef_id = users::register_user("chef", "chef@example.com", Some("Anna"), None, &pool)
        .await
        .unwrap();
    let guest_id = users::register_user("guest", "guest@example.com", None, None, &pool)
        .await
        .unwrap();

    let salt = ingredients::create_ingredient("Salt", "g", &pool).await.unwrap();
    let flour = ingredients::create_ingredient("Flour", "g", &pool).await.unwrap();
    let milk = ingredients::create_ingredient("Milk", "ml", &pool).await.unwrap();

    let breakfast = tags::create_tag("Breakfast", "#E26C2D", "breakfast", &pool)
        .await
        .unwrap();
    let dinner = tags::create_tag("Dinner", "#49B64E", "dinner", &pool)
        .await
        .unwrap();

    Fixture {
        pool,
        chef: SessionData::new(chef_id, "chef"),
        guest: SessionData::new(guest_id, "guest"),
        salt,
        flour,
        milk,
        breakfast,
        dinner,
    }
}

pub fn new_recipe(name: &str, ingredients: &[(Id, i32)], tags: &[Id]) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        text: format!("How to cook {name}"),
        cooking_time: 30,
        image: None,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
    }
}

pub async fn create(
    fixture: &Fixture,
    name: &str,
    ingredients: &[(Id, i32)],
    tags: &[Id],
) -> RecipeDetail {
    recipes::create_recipe(new_recipe(name, ingredients, tags), &fixture.chef, &fixture.pool)
        .await
        .unwrap()
}

pub async fn count(pool: &Pool<Sqlite>, sql: &str, id: Id) -> i64 {
    let row: (i64,) = sqlx::query_as(sql).bind(id).fetch_one(pool).await.unwrap();
    row.0
}
