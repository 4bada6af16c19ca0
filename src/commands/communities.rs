use crate::api::CommunityForm;
use crate::commands::{recover, CommunityCommand};
use crate::error::AppResult;
use crate::state::AppState;
use crate::views;

pub async fn run(state: &mut AppState, command: CommunityCommand) -> AppResult<String> {
    match command {
        CommunityCommand::List => {
            let (communities, notice) = recover(state.api.communities().await, "communities");
            views::communities(&communities, notice)
        }
        CommunityCommand::Show { name, order } => {
            let community = state.api.community(&name).await?;
            let (posts, notice) = recover(
                state.api.community_posts(&name, order).await,
                "community posts",
            );
            views::community(&community, &posts, &state.markers(), notice)
        }
        CommunityCommand::Create {
            name,
            description,
            avatar,
            banner,
        } => {
            let form = CommunityForm {
                name,
                description,
                avatar,
                banner,
            };
            let community = state.api.create_community(form).await?;
            Ok(format!("Created community {}", community.name))
        }
        CommunityCommand::Subscribe { name } => {
            state.api.subscribe(&name).await?;
            tracing::info!("Subscribed to {}", name);
            Ok(format!("Subscribed to {}", name))
        }
        CommunityCommand::Unsubscribe { name } => {
            state.api.unsubscribe(&name).await?;
            tracing::info!("Unsubscribed from {}", name);
            Ok(format!("Unsubscribed from {}", name))
        }
    }
}
