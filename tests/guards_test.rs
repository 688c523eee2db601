mod common;

use common::{count, create, fixture};
use recipe_share_sdk::{
    actions::{favorites, recipes, shopping_cart, subscriptions, users},
    error::ApiError,
};

#[tokio::test]
async fn favorite_twice_keeps_a_single_row() {
    let f = fixture().await;
    let recipe = create(&f, "Lasagna", &[(f.flour, 400)], &[f.dinner]).await;

    let first = favorites::add_to_favorites(recipe.id, &f.guest, &f.pool).await.unwrap();
    let second = favorites::add_to_favorites(recipe.id, &f.guest, &f.pool).await;

    assert_eq!(first.id, recipe.id);
    assert!(second.unwrap_err().is_validation());
    assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM favorites WHERE user_id = $1", f.guest.user_id).await, 1);
}

#[tokio::test]
async fn favorite_flags_follow_the_viewer() {
    let f = fixture().await;
    let recipe = create(&f, "Cake", &[(f.flour, 250)], &[f.dinner]).await;
    favorites::add_to_favorites(recipe.id, &f.guest, &f.pool).await.unwrap();

    let for_guest = recipes::get_recipe_detail(recipe.id, Some(&f.guest), &f.pool).await.unwrap().unwrap();
    let for_chef = recipes::get_recipe_detail(recipe.id, Some(&f.chef), &f.pool).await.unwrap().unwrap();
    let anonymous = recipes::get_recipe_detail(recipe.id, None, &f.pool).await.unwrap().unwrap();

    assert!(for_guest.is_favorited);
    assert!(!for_chef.is_favorited);
    assert!(!anonymous.is_favorited);
    assert_eq!(favorites::list_favorites(&f.guest, &f.pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn removing_missing_favorite_is_not_found() {
    let f = fixture().await;
    let recipe = create(&f, "Pie", &[(f.flour, 300)], &[f.dinner]).await;

    let not_added = favorites::remove_from_favorites(recipe.id, &f.guest, &f.pool).await;
    let no_recipe = favorites::add_to_favorites(555, &f.guest, &f.pool).await;

    assert!(matches!(not_added, Err(ApiError::NotFound(_))));
    assert!(matches!(no_recipe, Err(ApiError::NotFound(_))));

    favorites::add_to_favorites(recipe.id, &f.guest, &f.pool).await.unwrap();
    favorites::remove_from_favorites(recipe.id, &f.guest, &f.pool).await.unwrap();
    assert!(!favorites::is_favorite(recipe.id, f.guest.user_id, &f.pool).await.unwrap());
}

#[tokio::test]
async fn cart_entry_twice_is_rejected() {
    let f = fixture().await;
    let recipe = create(&f, "Chili", &[(f.salt, 4)], &[f.dinner]).await;

    shopping_cart::add_to_shopping_cart(recipe.id, &f.chef, &f.pool).await.unwrap();
    let second = shopping_cart::add_to_shopping_cart(recipe.id, &f.chef, &f.pool).await;

    assert!(matches!(second, Err(ApiError::Conflict(_))));
    assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM shopping_cart WHERE user_id = $1", f.chef.user_id).await, 1);

    shopping_cart::remove_from_shopping_cart(recipe.id, &f.chef, &f.pool).await.unwrap();
    let again = shopping_cart::remove_from_shopping_cart(recipe.id, &f.chef, &f.pool).await;
    assert!(matches!(again, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn cannot_subscribe_to_self() {
    let f = fixture().await;

    let result = subscriptions::subscribe(f.chef.user_id, &f.chef, &f.pool).await;

    assert!(matches!(result, Err(ApiError::Validation(message)) if message.contains("yourself")));
    assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1", f.chef.user_id).await, 0);
}

#[tokio::test]
async fn subscribing_twice_is_rejected() {
    let f = fixture().await;
    create(&f, "Ramen", &[(f.salt, 2)], &[f.dinner]).await;

    let view = subscriptions::subscribe(f.chef.user_id, &f.guest, &f.pool).await.unwrap();
    let second = subscriptions::subscribe(f.chef.user_id, &f.guest, &f.pool).await;

    assert!(view.author.is_subscribed);
    assert_eq!(view.recipes_count, 1);
    assert!(matches!(second, Err(ApiError::Conflict(message)) if message == "Already subscribed to this user"));
    assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1", f.guest.user_id).await, 1);
}

#[tokio::test]
async fn subscribing_to_missing_user_is_not_found() {
    let f = fixture().await;

    let subscribe = subscriptions::subscribe(4040, &f.guest, &f.pool).await;
    let unsubscribe = subscriptions::unsubscribe(f.chef.user_id, &f.guest, &f.pool).await;

    assert!(matches!(subscribe, Err(ApiError::NotFound(_))));
    assert!(matches!(unsubscribe, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn subscription_list_limits_recipes() {
    let f = fixture().await;
    create(&f, "Soup", &[(f.salt, 2)], &[f.dinner]).await;
    create(&f, "Stew", &[(f.salt, 3)], &[f.dinner]).await;
    let newest = create(&f, "Curry", &[(f.salt, 4)], &[f.dinner]).await;
    subscriptions::subscribe(f.chef.user_id, &f.guest, &f.pool).await.unwrap();

    let views = subscriptions::list_subscriptions(&f.guest, Some(1), &f.pool).await.unwrap();

    assert_eq!(views.len(), 1);
    assert_eq!(views[0].author.username, "chef");
    assert_eq!(views[0].recipes_count, 3);
    assert_eq!(views[0].recipes.len(), 1);
    assert_eq!(views[0].recipes[0].id, newest.id);

    let profile = users::get_user_profile(f.chef.user_id, Some(&f.guest), &f.pool).await.unwrap().unwrap();
    assert!(profile.is_subscribed);

    subscriptions::unsubscribe(f.chef.user_id, &f.guest, &f.pool).await.unwrap();
    assert!(subscriptions::list_subscriptions(&f.guest, None, &f.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn taken_username_is_a_conflict() {
    let f = fixture().await;

    let result = users::register_user("chef", "other@example.com", None, None, &f.pool).await;

    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[tokio::test]
async fn negative_recipes_limit_is_rejected() {
    let f = fixture().await;
    subscriptions::subscribe(f.chef.user_id, &f.guest, &f.pool).await.unwrap();

    let result = subscriptions::list_subscriptions(&f.guest, Some(-1), &f.pool).await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
}
