pub mod analytics_event;
pub mod captcha_token;
pub mod comment;
pub mod comment_file;
pub mod comment_like;
pub mod daily_stats;
pub mod file_upload_log;
pub mod image_file;
pub mod popular_content;
pub mod search_query;
pub mod text_file;
pub mod uploaded_file;
pub mod user;
pub mod user_activity;
pub mod user_preference;

pub use analytics_event::Entity as AnalyticsEventEntity;
pub use captcha_token::Entity as CaptchaTokenEntity;
pub use comment::Entity as CommentEntity;
pub use comment_file::Entity as CommentFileEntity;
pub use comment_like::Entity as CommentLikeEntity;
pub use daily_stats::Entity as DailyStatsEntity;
pub use file_upload_log::Entity as FileUploadLogEntity;
pub use image_file::Entity as ImageFileEntity;
pub use popular_content::Entity as PopularContentEntity;
pub use search_query::Entity as SearchQueryEntity;
pub use text_file::Entity as TextFileEntity;
pub use uploaded_file::Entity as UploadedFileEntity;
pub use user::Entity as UserEntity;
pub use user_activity::Entity as UserActivityEntity;
pub use user_preference::Entity as UserPreferenceEntity;
