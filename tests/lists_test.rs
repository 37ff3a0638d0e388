/// Favorites, shopping cart and the aggregated shopping list.
mod utils;

use foodgram_sdk::{
    actions::{
        add_to_favorites, add_to_shopping_cart, build_shopping_list, create_recipe, get_recipe,
        is_favorite, remove_from_favorites, remove_from_shopping_cart,
    },
    error::ServiceError,
    reply::shopping_list_reply,
};
use utils::{
    db::{test_media, test_pool},
    factories,
};

#[tokio::test]
async fn favorite_toggle_reports_duplicates_and_missing_rows() {
    let Some(pool) = test_pool().await else { return };
    let media = test_media();
    let author = factories::user(&pool).await;
    let fan = factories::user(&pool).await;
    let tag = factories::tag(&pool).await;
    let flour = factories::ingredient(&pool, &factories::unique_name("flour"), "g").await;

    let recipe = create_recipe(
        factories::recipe_form(&[tag.id], &[(flour.id, 100)]),
        &author,
        &media,
        &pool,
    )
    .await
    .unwrap();

    let summary = add_to_favorites(recipe.id, &fan, &pool).await.unwrap();
    assert_eq!(summary.id, recipe.id);
    assert!(is_favorite(recipe.id, Some(&fan), &pool).await.unwrap());
    assert!(!is_favorite(recipe.id, None, &pool).await.unwrap());
    assert!(get_recipe(recipe.id, Some(&fan), &pool).await.unwrap().is_favorited);

    assert!(matches!(
        add_to_favorites(recipe.id, &fan, &pool).await,
        Err(ServiceError::AlreadyExists(_))
    ));

    remove_from_favorites(recipe.id, &fan, &pool).await.unwrap();
    assert!(matches!(
        remove_from_favorites(recipe.id, &fan, &pool).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        add_to_favorites(i32::MAX, &fan, &pool).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn shopping_list_sums_shared_ingredients() {
    let Some(pool) = test_pool().await else { return };
    let media = test_media();
    let author = factories::user(&pool).await;
    let shopper = factories::user(&pool).await;
    let tag = factories::tag(&pool).await;
    let flour_name = factories::unique_name("flour");
    let salt_name = factories::unique_name("salt");
    let flour = factories::ingredient(&pool, &flour_name, "g").await;
    let salt = factories::ingredient(&pool, &salt_name, "g").await;

    let bread = create_recipe(
        factories::recipe_form(&[tag.id], &[(flour.id, 100), (salt.id, 5)]),
        &author,
        &media,
        &pool,
    )
    .await
    .unwrap();
    let cake = create_recipe(
        factories::recipe_form(&[tag.id], &[(flour.id, 50)]),
        &author,
        &media,
        &pool,
    )
    .await
    .unwrap();

    add_to_shopping_cart(bread.id, &shopper, &pool).await.unwrap();
    add_to_shopping_cart(cake.id, &shopper, &pool).await.unwrap();

    let list = build_shopping_list(&shopper, &pool).await.unwrap();
    assert_eq!(
        list.to_string(),
        format!("{flour_name} (g) - 150\n{salt_name} (g) - 5\n")
    );
    let response = shopping_list_reply(&list).unwrap();
    assert_eq!(response.status(), 200);

    remove_from_shopping_cart(bread.id, &shopper, &pool).await.unwrap();
    let list = build_shopping_list(&shopper, &pool).await.unwrap();
    assert_eq!(list.to_string(), format!("{flour_name} (g) - 50\n"));
}

#[tokio::test]
async fn empty_cart_yields_empty_list() {
    let Some(pool) = test_pool().await else { return };
    let shopper = factories::user(&pool).await;

    let list = build_shopping_list(&shopper, &pool).await.unwrap();
    assert!(list.is_empty());
    assert_eq!(list.to_string(), "");
}
