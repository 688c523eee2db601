mod common;

use common::new_recipe;
use recipe_share_sdk::{
    actions::{ingredients, recipes, tags, users},
    connect,
    jwt::SessionData,
    migrate, Config,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_on_a_file_database_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("recipes.db").display()),
        bind_address: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: String::from("secret"),
        max_connections: 5,
    };
    let pool = connect(&config).await.unwrap();
    migrate(&pool).await.unwrap();

    let chef_id = users::register_user("chef", "chef@example.com", None, None, &pool)
        .await
        .unwrap();
    let salt = ingredients::create_ingredient("Salt", "g", &pool).await.unwrap();
    let dinner = tags::create_tag("Dinner", "#49B64E", "dinner", &pool)
        .await
        .unwrap();
    let chef = SessionData::new(chef_id, "chef");

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let pool = pool.clone();
            let chef = chef.clone();
            tokio::spawn(async move {
                let recipe = new_recipe(&format!("Soup #{n}"), &[(salt, 5), (salt, n + 1)], &[dinner]);
                recipes::create_recipe(recipe, &chef, &pool).await
            })
        })
        .collect();

    for handle in handles {
        let recipe = handle.await.unwrap().unwrap();
        assert_eq!(recipe.ingredients.len(), 1);
    }

    assert_eq!(recipes::count_recipes_by_author(chef_id, &pool).await.unwrap(), 20);
}
